//! The radix tree that stores the routes of one HTTP method.
//!
//! Static text is compressed along shared prefixes. A node may have any number of static
//! children plus at most one wildcard child, which is either a named param (`:name`, matching
//! one non-empty path segment) or a catch-all (`*name`, matching the rest of the path and
//! required to be the last element of a route).
//!
//! Lookup prefers static children, ordered by how many routes pass through them, then the
//! param child, then the catch-all child. It backtracks only at node boundaries.

use std::mem;
use std::sync::Arc;

use crate::error::InsertError;
use crate::params::Params;

/// Upper bound on the number of params a single route may declare.
pub const MAX_PARAMS: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeKind {
    Static,
    Param(Arc<str>),
    CatchAll(Arc<str>),
}

/// A node of the routing tree. The tree itself is its root node, whose path is empty.
#[derive(Debug, Clone)]
pub struct Node<T> {
    path: String,
    kind: NodeKind,
    // first char of every static child, in the same order as `children`
    indices: Vec<char>,
    children: Vec<Node<T>>,
    wild: Option<Box<Node<T>>>,
    value: Option<T>,
    priority: u32,
}

/// The outcome of [`Node::lookup`].
#[derive(Debug)]
pub struct Lookup<'n, T> {
    pub value: Option<&'n T>,
    /// No route matched, but one would match with one trailing slash added or removed.
    pub tsr: bool,
}

#[derive(Debug, Copy, Clone)]
enum Piece<'p> {
    Static(&'p str),
    Param(&'p str),
    CatchAll(&'p str),
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Node<T> {
    pub fn new() -> Self {
        Self::with_kind(String::new(), NodeKind::Static)
    }

    fn with_kind(path: String, kind: NodeKind) -> Self {
        Self { path, kind, indices: Vec::new(), children: Vec::new(), wild: None, value: None, priority: 0 }
    }

    fn wildcard(piece: Piece<'_>) -> Self {
        match piece {
            Piece::Param(name) => Self::with_kind(format!(":{name}"), NodeKind::Param(Arc::from(name))),
            Piece::CatchAll(name) => Self::with_kind(format!("*{name}"), NodeKind::CatchAll(Arc::from(name))),
            Piece::Static(text) => Self::with_kind(text.to_owned(), NodeKind::Static),
        }
    }

    /// Registers `value` under `path`.
    ///
    /// On error the tree is left untouched.
    pub fn insert(&mut self, path: &str, value: T) -> Result<(), InsertError> {
        let pieces = parse(path)?;
        self.check_pieces(&pieces, path)?;
        self.insert_pieces(&pieces, value);
        Ok(())
    }

    /// Checks that `path` could be inserted, without touching the tree.
    pub fn check(&self, path: &str) -> Result<(), InsertError> {
        let pieces = parse(path)?;
        self.check_pieces(&pieces, path)
    }

    fn check_pieces(&self, pieces: &[Piece<'_>], route: &str) -> Result<(), InsertError> {
        let Some((piece, rest)) = pieces.split_first() else {
            return match self.value {
                Some(_) => Err(InsertError::Conflict { path: route.to_owned() }),
                None => Ok(()),
            };
        };

        let (kind, segment) = match *piece {
            Piece::Static(text) => return self.check_static(text, rest, route),
            Piece::Param(name) => (NodeKind::Param(Arc::from(name)), format!(":{name}")),
            Piece::CatchAll(name) => (NodeKind::CatchAll(Arc::from(name)), format!("*{name}")),
        };

        let Some(wild) = self.wild.as_deref() else { return Ok(()) };
        if wild.kind != kind {
            return Err(InsertError::WildcardConflict { path: route.to_owned(), segment, existing: wild.path.clone() });
        }
        wild.check_pieces(rest, route)
    }

    fn check_static(&self, text: &str, rest: &[Piece<'_>], route: &str) -> Result<(), InsertError> {
        let Some(first) = text.chars().next() else {
            return self.check_pieces(rest, route);
        };
        let Some(i) = self.indices.iter().position(|c| *c == first) else { return Ok(()) };

        let child = &self.children[i];
        let common = longest_common_prefix(&child.path, text);
        // a split creates a fresh node without value or wildcard
        if common < child.path.len() {
            return Ok(());
        }

        let remaining = &text[common..];
        if remaining.is_empty() { child.check_pieces(rest, route) } else { child.check_static(remaining, rest, route) }
    }

    // callers run `check_pieces` first, so nothing below can conflict
    fn insert_pieces(&mut self, pieces: &[Piece<'_>], value: T) {
        let Some((piece, rest)) = pieces.split_first() else {
            self.value = Some(value);
            return;
        };

        if let Piece::Static(text) = *piece {
            self.insert_static(text, rest, value);
            return;
        }

        let wild = self.wild.get_or_insert_with(|| Box::new(Node::wildcard(*piece)));
        wild.priority += 1;
        wild.insert_pieces(rest, value);
    }

    fn insert_static(&mut self, text: &str, rest: &[Piece<'_>], value: T) {
        let Some(first) = text.chars().next() else {
            self.insert_pieces(rest, value);
            return;
        };

        let Some(i) = self.indices.iter().position(|c| *c == first) else {
            self.indices.push(first);
            self.children.push(Node::with_kind(text.to_owned(), NodeKind::Static));
            let i = self.bump_child(self.children.len() - 1);
            self.children[i].insert_pieces(rest, value);
            return;
        };

        let i = self.bump_child(i);
        let child = &mut self.children[i];

        let common = longest_common_prefix(&child.path, text);
        if common < child.path.len() {
            child.split(common);
        }

        let remaining = &text[common..];
        if remaining.is_empty() {
            child.insert_pieces(rest, value);
        } else {
            child.insert_static(remaining, rest, value);
        }
    }

    /// Moves everything below `at` into a new static child.
    fn split(&mut self, at: usize) {
        let suffix = Node {
            path: self.path.split_off(at),
            kind: NodeKind::Static,
            indices: mem::take(&mut self.indices),
            children: mem::take(&mut self.children),
            wild: self.wild.take(),
            value: self.value.take(),
            priority: self.priority - 1,
        };

        self.indices = suffix.path.chars().next().into_iter().collect();
        self.children = vec![suffix];
    }

    /// Increments the priority of the static child at `i` and moves it ahead of its less
    /// used siblings. Returns the new position of the child.
    fn bump_child(&mut self, i: usize) -> usize {
        self.children[i].priority += 1;
        let priority = self.children[i].priority;

        let mut pos = i;
        while pos > 0 && self.children[pos - 1].priority < priority {
            self.children.swap(pos - 1, pos);
            self.indices.swap(pos - 1, pos);
            pos -= 1;
        }
        pos
    }

    /// Finds the value registered for `path`, pushing matched params into `params`.
    ///
    /// `params` is left unchanged when nothing matches.
    pub fn at(&self, path: &str, params: &mut Params) -> Option<&T> {
        self.find(path, params)
    }

    /// Like [`at`](Node::at), additionally telling whether a miss would have been a hit with
    /// one trailing slash added or removed.
    pub fn lookup(&self, path: &str, params: &mut Params) -> Lookup<'_, T> {
        if let Some(value) = self.find(path, params) {
            return Lookup { value: Some(value), tsr: false };
        }
        Lookup { value: None, tsr: self.recommends_trailing_slash(path, params) }
    }

    fn recommends_trailing_slash(&self, path: &str, params: &mut Params) -> bool {
        if path == "/" {
            return false;
        }

        let mark = params.len();
        let found = match path.strip_suffix('/') {
            Some(trimmed) => self.find(trimmed, params).is_some(),
            None => self.find(&format!("{path}/"), params).is_some(),
        };
        params.truncate(mark);
        found
    }

    fn find(&self, rest: &str, params: &mut Params) -> Option<&T> {
        if rest.is_empty() {
            if let Some(value) = &self.value {
                return Some(value);
            }
            // a catch-all also matches the empty remainder
            if let Some(wild) = &self.wild
                && let NodeKind::CatchAll(key) = &wild.kind
                && let Some(value) = &wild.value
            {
                params.push(key, "");
                return Some(value);
            }
            return None;
        }

        let first = rest.chars().next();
        if let Some(i) = self.indices.iter().position(|c| Some(*c) == first) {
            let child = &self.children[i];
            if let Some(after) = rest.strip_prefix(child.path.as_str())
                && let Some(value) = child.find(after, params)
            {
                return Some(value);
            }
        }

        let wild = self.wild.as_deref()?;
        match &wild.kind {
            NodeKind::Param(key) => {
                let end = rest.find('/').unwrap_or(rest.len());
                if end == 0 {
                    return None;
                }

                let mark = params.len();
                params.push(key, &rest[..end]);
                let found = wild.find(&rest[end..], params);
                if found.is_none() {
                    params.truncate(mark);
                }
                found
            }
            NodeKind::CatchAll(key) => {
                let value = wild.value.as_ref()?;
                params.push(key, rest);
                Some(value)
            }
            NodeKind::Static => None,
        }
    }

    /// Looks `path` up ignoring case and returns the registered spelling of it.
    ///
    /// Param and catch-all values keep the spelling of the request. With
    /// `fix_trailing_slash`, a path that only matches with one trailing slash added or
    /// removed is corrected as well.
    pub fn find_case_insensitive(&self, path: &str, fix_trailing_slash: bool) -> Option<String> {
        let mut fixed = String::with_capacity(path.len() + 1);
        if self.find_ci(path, &mut fixed) {
            return Some(fixed);
        }
        if !fix_trailing_slash || path == "/" {
            return None;
        }

        fixed.clear();
        let found = match path.strip_suffix('/') {
            Some(trimmed) => self.find_ci(trimmed, &mut fixed),
            None => self.find_ci(&format!("{path}/"), &mut fixed),
        };
        found.then_some(fixed)
    }

    fn find_ci(&self, rest: &str, fixed: &mut String) -> bool {
        if rest.is_empty() {
            return self.value.is_some()
                || self.wild.as_deref().is_some_and(|w| matches!(w.kind, NodeKind::CatchAll(_)) && w.value.is_some());
        }

        let Some(first) = rest.chars().next() else { return false };
        for (i, c) in self.indices.iter().enumerate() {
            if !eq_ignore_case(*c, first) {
                continue;
            }

            let child = &self.children[i];
            if let Some(consumed) = prefix_len_ignore_case(rest, &child.path) {
                let mark = fixed.len();
                fixed.push_str(&child.path);
                if child.find_ci(&rest[consumed..], fixed) {
                    return true;
                }
                fixed.truncate(mark);
            }
        }

        let Some(wild) = self.wild.as_deref() else { return false };
        match wild.kind {
            NodeKind::Param(_) => {
                let end = rest.find('/').unwrap_or(rest.len());
                if end == 0 {
                    return false;
                }
                let mark = fixed.len();
                fixed.push_str(&rest[..end]);
                if wild.find_ci(&rest[end..], fixed) {
                    return true;
                }
                fixed.truncate(mark);
                false
            }
            NodeKind::CatchAll(_) => {
                if wild.value.is_some() {
                    fixed.push_str(rest);
                    true
                } else {
                    false
                }
            }
            NodeKind::Static => false,
        }
    }

    /// Every registered route, as (path, value), in lookup order.
    pub fn routes(&self) -> Vec<(String, &T)> {
        let mut routes = Vec::new();
        self.walk(&mut String::new(), &mut routes);
        routes
    }

    fn walk<'n>(&'n self, prefix: &mut String, routes: &mut Vec<(String, &'n T)>) {
        let mark = prefix.len();
        prefix.push_str(&self.path);
        if let Some(value) = &self.value {
            routes.push((prefix.clone(), value));
        }
        for child in &self.children {
            child.walk(prefix, routes);
        }
        if let Some(wild) = &self.wild {
            wild.walk(prefix, routes);
        }
        prefix.truncate(mark);
    }

    /// The largest number of params any route below this node can produce.
    pub fn max_params(&self) -> usize {
        let own = usize::from(!matches!(self.kind, NodeKind::Static));
        let below = self.children.iter().chain(self.wild.as_deref()).map(Node::max_params).max().unwrap_or(0);
        own + below
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.children.is_empty() && self.wild.is_none()
    }

    /// Checks that every node's priority equals the number of routes below it.
    #[cfg(test)]
    pub(crate) fn check_priorities(&self) -> Result<u32, (u32, u32)> {
        let mut priority = u32::from(self.value.is_some());
        for child in self.children.iter().chain(self.wild.as_deref()) {
            priority += child.check_priorities()?;
        }

        // the root is never walked through, so its counter stays zero
        if !self.path.is_empty() && self.priority != priority {
            return Err((self.priority, priority));
        }
        Ok(priority)
    }
}

fn parse(path: &str) -> Result<Vec<Piece<'_>>, InsertError> {
    if !path.starts_with('/') {
        return Err(InsertError::MissingLeadingSlash { path: path.to_owned() });
    }

    let mut pieces = Vec::new();
    let mut count = 0;
    let mut rest = path;
    while let Some(start) = rest.find([':', '*']) {
        let (before, wildcard) = rest.split_at(start);
        let end = wildcard.find('/').unwrap_or(wildcard.len());
        let segment = &wildcard[..end];
        let name = &segment[1..];

        if name.is_empty() {
            return Err(InsertError::UnnamedWildcard { path: path.to_owned() });
        }
        if name.contains([':', '*']) {
            return Err(InsertError::TooManyWildcards { path: path.to_owned(), segment: segment.to_owned() });
        }

        if !before.is_empty() {
            pieces.push(Piece::Static(before));
        }
        if segment.starts_with('*') {
            if end != wildcard.len() {
                return Err(InsertError::CatchAllNotLast { path: path.to_owned() });
            }
            if !before.ends_with('/') {
                return Err(InsertError::NoSlashBeforeCatchAll { path: path.to_owned() });
            }
            pieces.push(Piece::CatchAll(name));
        } else {
            pieces.push(Piece::Param(name));
        }

        count += 1;
        rest = &wildcard[end..];
    }

    if !rest.is_empty() {
        pieces.push(Piece::Static(rest));
    }
    if count > MAX_PARAMS {
        return Err(InsertError::TooManyParams { path: path.to_owned(), count, max: MAX_PARAMS });
    }
    Ok(pieces)
}

/// Byte length of the longest common prefix of `a` and `b`, on a char boundary of both.
fn longest_common_prefix(a: &str, b: &str) -> usize {
    a.char_indices().zip(b.chars()).find(|((_, x), y)| x != y).map_or(a.len().min(b.len()), |((i, _), _)| i)
}

fn eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// If `rest` starts with `pattern` ignoring case, the number of bytes of `rest` it spans.
fn prefix_len_ignore_case(rest: &str, pattern: &str) -> Option<usize> {
    let mut rest_chars = rest.char_indices();
    for expected in pattern.chars() {
        let (_, actual) = rest_chars.next()?;
        if !eq_ignore_case(expected, actual) {
            return None;
        }
    }
    Some(rest_chars.next().map_or(rest.len(), |(i, _)| i))
}
