//! Route table and matching.

/// One route, possibly with nested children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRecord {
    /// Absolute (`/index`) or, for children, relative (`keys`) path pattern.
    /// Segments starting with `:` match any single segment.
    pub path: String,
    pub name: Option<String>,
    /// Where navigation to this record is sent instead.
    pub redirect: Option<String>,
    pub requires_auth: bool,
    pub children: Vec<RouteRecord>,
}

impl RouteRecord {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: None,
            redirect: None,
            requires_auth: false,
            children: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn redirect_to(mut self, target: impl Into<String>) -> Self {
        self.redirect = Some(target.into());
        self
    }

    pub fn requires_auth(mut self) -> Self {
        self.requires_auth = true;
        self
    }

    pub fn child(mut self, child: RouteRecord) -> Self {
        self.children.push(child);
        self
    }
}

/// Ordered set of routes; the first match wins.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<RouteRecord>,
}

impl RouteTable {
    pub fn new(routes: Vec<RouteRecord>) -> Self {
        Self { routes }
    }

    /// The chat client's views.
    pub fn chat_routes() -> Self {
        Self::new(vec![
            RouteRecord::new("/").redirect_to("/index").requires_auth(),
            RouteRecord::new("/register"),
            RouteRecord::new("/history"),
            RouteRecord::new("/index").requires_auth(),
            RouteRecord::new("/security").named("security").requires_auth(),
            RouteRecord::new("/login"),
        ])
    }

    /// Records matching `path`, outermost ancestor first. Empty when nothing
    /// matches.
    pub fn resolve(&self, path: &str) -> Vec<&RouteRecord> {
        let target = segments(path);
        for route in &self.routes {
            let mut chain = Vec::new();
            if match_record(route, &[], &target, &mut chain) {
                return chain;
            }
        }
        Vec::new()
    }
}

fn segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn join(base: &[String], path: &str) -> Vec<String> {
    if path.starts_with('/') {
        segments(path)
    } else {
        let mut full = base.to_vec();
        full.extend(segments(path));
        full
    }
}

fn match_record<'a>(
    record: &'a RouteRecord,
    base: &[String],
    target: &[String],
    chain: &mut Vec<&'a RouteRecord>,
) -> bool {
    let pattern = join(base, &record.path);
    chain.push(record);

    for child in &record.children {
        if match_record(child, &pattern, target, chain) {
            return true;
        }
    }
    if pattern_matches(&pattern, target) {
        return true;
    }

    chain.pop();
    false
}

fn pattern_matches(pattern: &[String], target: &[String]) -> bool {
    pattern.len() == target.len()
        && pattern
            .iter()
            .zip(target)
            .all(|(p, t)| p.starts_with(':') || p == t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_routes_resolve() {
        let table = RouteTable::chat_routes();
        let index = table.resolve("/index");
        assert_eq!(index.len(), 1);
        assert!(index[0].requires_auth);

        let root = table.resolve("/");
        assert_eq!(root[0].redirect.as_deref(), Some("/index"));

        assert!(!table.resolve("/login")[0].requires_auth);
        assert!(table.resolve("/nowhere").is_empty());
        assert_eq!(table.resolve("/security")[0].name.as_deref(), Some("security"));
    }

    #[test]
    fn trailing_slash_is_ignored() {
        let table = RouteTable::chat_routes();
        assert_eq!(table.resolve("/history/")[0].path, "/history");
    }

    #[test]
    fn nested_routes_report_ancestors() {
        let table = RouteTable::new(vec![
            RouteRecord::new("/settings")
                .requires_auth()
                .child(RouteRecord::new("profile").named("profile"))
                .child(RouteRecord::new("rooms/:id")),
        ]);

        let chain = table.resolve("/settings/profile");
        let paths: Vec<_> = chain.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, ["/settings", "profile"]);
        assert!(chain.iter().any(|r| r.requires_auth));

        assert_eq!(table.resolve("/settings/rooms/42").len(), 2);
        assert!(table.resolve("/settings/rooms").is_empty());
        assert_eq!(chain[1].name.as_deref(), Some("profile"));
    }
}
