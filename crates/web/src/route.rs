use std::sync::Arc;

use http::Method;

use crate::error::InsertError;
use crate::handler::HandlerChain;
use crate::params::Params;
use crate::tree::{Lookup, Node};

/// What the tree stores for a route: the full handler chain and the registered path.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub handlers: HandlerChain,
    pub full_path: Arc<str>,
}

/// A registered route, as reported by [`Engine::routes`](crate::Engine::routes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub method: Method,
    pub path: String,
    /// Name of the last handler of the chain.
    pub handler: &'static str,
    pub handlers: usize,
}

/// One routing tree per HTTP method.
///
/// A server usually registers a handful of methods, so a linear scan beats hashing here.
#[derive(Debug, Default)]
pub struct RouteTable {
    trees: Vec<(Method, Node<Endpoint>)>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, method: &Method) -> Option<&Node<Endpoint>> {
        self.trees.iter().find(|(m, _)| m == method).map(|(_, root)| root)
    }

    pub fn add(&mut self, method: Method, path: &str, handlers: HandlerChain) -> Result<(), InsertError> {
        let endpoint = Endpoint { handlers, full_path: Arc::from(path) };
        if let Some((_, root)) = self.trees.iter_mut().find(|(m, _)| *m == method) {
            return root.insert(path, endpoint);
        }

        let mut root = Node::new();
        root.insert(path, endpoint)?;
        self.trees.push((method, root));
        Ok(())
    }

    /// Checks that `path` could be added for `method`, without changing the table.
    pub fn check(&self, method: &Method, path: &str) -> Result<(), InsertError> {
        match self.get(method) {
            Some(root) => root.check(path),
            None => Node::<Endpoint>::new().check(path),
        }
    }

    /// Looks `path` up in the tree of `method`.
    pub fn lookup<'t>(&'t self, method: &Method, path: &str, params: &mut Params) -> Lookup<'t, Endpoint> {
        match self.get(method) {
            Some(root) => root.lookup(path, params),
            None => Lookup { value: None, tsr: false },
        }
    }

    /// Methods other than `method` whose tree has a route for `path`.
    pub fn allowed(&self, method: &Method, path: &str, params: &mut Params) -> Vec<Method> {
        let mark = params.len();
        self.trees
            .iter()
            .filter(|(m, _)| m != method)
            .filter(|(_, root)| {
                let found = root.at(path, params).is_some();
                params.truncate(mark);
                found
            })
            .map(|(m, _)| m.clone())
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&Method, &Node<Endpoint>)> {
        self.trees.iter().map(|(method, root)| (method, root))
    }

    pub fn routes(&self) -> Vec<Route> {
        self.trees
            .iter()
            .flat_map(|(method, root)| {
                root.routes().into_iter().map(move |(path, endpoint)| Route {
                    method: method.clone(),
                    path,
                    handler: endpoint.handlers.last().map_or("", |h| h.name()),
                    handlers: endpoint.handlers.len(),
                })
            })
            .collect()
    }

    pub fn max_params(&self) -> usize {
        self.trees.iter().map(|(_, root)| root.max_params()).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::RouteTable;
    use crate::context::Context;
    use crate::handler::{HandlerChain, handler_fn};
    use crate::params::Params;
    use http::Method;

    fn show(_ctx: &mut Context) {}

    fn chain() -> HandlerChain {
        HandlerChain::new([handler_fn(show)]).unwrap()
    }

    #[test]
    fn test_one_tree_per_method() {
        let mut table = RouteTable::new();
        table.add(Method::GET, "/users/:id", chain()).unwrap();
        table.add(Method::POST, "/users", chain()).unwrap();
        table.add(Method::GET, "/users", chain()).unwrap();

        assert_eq!(table.iter().count(), 2);
        assert_eq!(table.max_params(), 1);

        let mut params = Params::new();
        let found = table.lookup(&Method::GET, "/users/3", &mut params);
        assert_eq!(&*found.value.unwrap().full_path, "/users/:id");
        assert_eq!(params.by_name("id"), "3");

        assert!(table.lookup(&Method::DELETE, "/users", &mut params).value.is_none());
    }

    #[test]
    fn test_allowed_methods() {
        let mut table = RouteTable::new();
        table.add(Method::POST, "/x", chain()).unwrap();
        table.add(Method::PUT, "/x", chain()).unwrap();
        table.add(Method::GET, "/y", chain()).unwrap();

        let mut params = Params::new();
        assert_eq!(table.allowed(&Method::GET, "/x", &mut params), vec![Method::POST, Method::PUT]);
        assert!(table.allowed(&Method::GET, "/z", &mut params).is_empty());
    }

    #[test]
    fn test_routes() {
        let mut table = RouteTable::new();
        table.add(Method::GET, "/", chain()).unwrap();
        table.add(Method::GET, "/files/*filepath", chain()).unwrap();

        let routes = table.routes();
        assert_eq!(routes.len(), 2);
        assert!(routes.iter().all(|r| r.method == Method::GET && r.handlers == 1));
        assert!(routes.iter().any(|r| r.path == "/files/*filepath"));
        assert!(routes[0].handler.ends_with("show"));
    }
}
