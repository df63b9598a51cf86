use serde::Deserialize;

/// Routing behaviour of an [`Engine`](crate::Engine).
///
/// Every field has a default, so a partial document deserializes fine:
///
/// ```
/// use switchyard_web::EngineConfig;
///
/// let config: EngineConfig = serde_json::from_str(r#"{ "redirect_fixed_path": true }"#).unwrap();
/// assert!(config.redirect_trailing_slash);
/// assert!(config.redirect_fixed_path);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools, reason = "independent switches")]
pub struct EngineConfig {
    /// Redirect `/foo/` to `/foo` (and the other way around) when only the other form is
    /// registered. GET requests get a 301, every other method a 307.
    pub redirect_trailing_slash: bool,

    /// Clean the path and retry the lookup case-insensitively when nothing matched, then
    /// redirect to the registered spelling. `/FOO` and `/..//Foo` both end up at `/foo`.
    pub redirect_fixed_path: bool,

    /// Answer `405 Method Not Allowed` instead of `404` when another method has a route for
    /// the path.
    pub handle_method_not_allowed: bool,

    /// Trust `X-Real-Ip` and `X-Forwarded-For` in [`Context::client_ip`](crate::Context::client_ip).
    pub fetch_client_ip_from_header: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            redirect_trailing_slash: true,
            redirect_fixed_path: false,
            handle_method_not_allowed: false,
            fetch_client_ip_from_header: false,
        }
    }
}
