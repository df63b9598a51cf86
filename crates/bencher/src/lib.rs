/// A named set of routes and the request paths used to exercise them.
#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    routes: RouteSet,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, routes: RouteSet) -> Self {
        Self { name, group, routes }
    }

    pub fn small(name: &'static str, routes: RouteSet) -> Self {
        Self::new(name, TestGroup::Small, routes)
    }

    pub fn normal(name: &'static str, routes: RouteSet) -> Self {
        Self::new(name, TestGroup::Normal, routes)
    }

    pub fn large(name: &'static str, routes: RouteSet) -> Self {
        Self::new(name, TestGroup::Large, routes)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn routes(&self) -> &RouteSet {
        &self.routes
    }
}

#[derive(Debug, Copy, Clone)]
pub struct RouteSet {
    routes: &'static [&'static str],
    paths: &'static [&'static str],
}

impl RouteSet {
    pub const fn new(routes: &'static [&'static str], paths: &'static [&'static str]) -> Self {
        Self { routes, paths }
    }

    /// Route patterns to register.
    pub fn routes(&self) -> &'static [&'static str] {
        self.routes
    }

    /// Request paths, each matching one of the routes.
    pub fn paths(&self) -> &'static [&'static str] {
        self.paths
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Normal,
    Large,
}

pub static STATIC_ROUTES: RouteSet = RouteSet::new(
    &["/", "/cmd.html", "/code.html", "/contrib.html", "/doc/", "/doc/go_faq.html", "/doc/go_spec.html", "/help.html"],
    &["/", "/contrib.html", "/doc/go_faq.html", "/help.html"],
);

pub static GITHUB_ROUTES: RouteSet = RouteSet::new(
    &[
        "/authorizations",
        "/authorizations/:id",
        "/applications/:client_id/tokens/:access_token",
        "/events",
        "/repos/:owner/:repo/events",
        "/networks/:owner/:repo/events",
        "/orgs/:org/events",
        "/users/:user/received_events",
        "/users/:user/received_events/public",
        "/users/:user/events",
        "/users/:user/events/public",
        "/users/:user/events/orgs/:org",
        "/feeds",
        "/notifications",
        "/repos/:owner/:repo/notifications",
        "/notifications/threads/:id",
        "/notifications/threads/:id/subscription",
        "/repos/:owner/:repo/stargazers",
        "/users/:user/starred",
        "/user/starred",
        "/user/starred/:owner/:repo",
        "/repos/:owner/:repo/subscribers",
        "/users/:user/subscriptions",
        "/user/subscriptions",
        "/repos/:owner/:repo/subscription",
        "/user/subscriptions/:owner/:repo",
        "/users/:user/gists",
        "/gists",
        "/gists/:id",
        "/gists/:id/star",
        "/repos/:owner/:repo/git/blobs/:sha",
        "/repos/:owner/:repo/git/commits/:sha",
        "/repos/:owner/:repo/git/refs",
        "/repos/:owner/:repo/git/tags/:sha",
        "/repos/:owner/:repo/git/trees/:sha",
        "/issues",
        "/user/issues",
        "/orgs/:org/issues",
        "/repos/:owner/:repo/issues",
        "/repos/:owner/:repo/issues/:number",
        "/repos/:owner/:repo/assignees",
        "/repos/:owner/:repo/assignees/:assignee",
        "/repos/:owner/:repo/issues/:number/comments",
        "/repos/:owner/:repo/issues/:number/events",
        "/repos/:owner/:repo/labels",
        "/repos/:owner/:repo/labels/:name",
        "/repos/:owner/:repo/milestones",
        "/repos/:owner/:repo/milestones/:number",
        "/emojis",
        "/gitignore/templates",
        "/gitignore/templates/:name",
        "/meta",
        "/rate_limit",
        "/users/:user/orgs",
        "/user/orgs",
        "/orgs/:org",
        "/orgs/:org/members",
        "/orgs/:org/members/:user",
        "/orgs/:org/teams",
        "/teams/:id",
        "/teams/:id/members",
        "/user/teams",
        "/repos/:owner/:repo/pulls",
        "/repos/:owner/:repo/pulls/:number",
        "/repos/:owner/:repo/pulls/:number/commits",
        "/repos/:owner/:repo/pulls/:number/files",
        "/repos/:owner/:repo/pulls/:number/merge",
        "/user/repos",
        "/users/:user/repos",
        "/orgs/:org/repos",
        "/repositories",
        "/repos/:owner/:repo",
        "/repos/:owner/:repo/contributors",
        "/repos/:owner/:repo/languages",
        "/repos/:owner/:repo/tags",
        "/repos/:owner/:repo/branches/:branch",
        "/repos/:owner/:repo/collaborators/:user",
        "/repos/:owner/:repo/contents/*path",
        "/search/repositories",
        "/search/code",
        "/search/issues",
        "/search/users",
        "/users/:user",
        "/user",
        "/users",
        "/user/emails",
        "/users/:user/followers",
        "/user/following/:user",
        "/users/:user/keys",
        "/user/keys/:id",
    ],
    &[
        "/authorizations/12",
        "/applications/abc/tokens/def",
        "/repos/rust-lang/rust/events",
        "/users/octocat/received_events/public",
        "/users/octocat/events/orgs/github",
        "/notifications/threads/7/subscription",
        "/user/starred/rust-lang/cargo",
        "/repos/rust-lang/rust/git/trees/9fceb02",
        "/repos/rust-lang/rust/issues/42/comments",
        "/gitignore/templates/Rust",
        "/orgs/github/members/octocat",
        "/repos/rust-lang/rust/pulls/100/files",
        "/repos/rust-lang/rust/contents/src/lib.rs",
        "/search/code",
        "/users/octocat",
        "/user/keys/3",
    ],
);
