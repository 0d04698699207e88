use riftlink_protocol::Header;

/// Ordered set of call headers, unique by name.
///
/// Inserting a header whose name is already present replaces the old
/// value in place, so the flex client id can be swapped for the session
/// token without growing the list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderSet {
    headers: Vec<Header>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces `header`.
    pub fn insert(&mut self, header: Header) {
        match self.headers.iter_mut().find(|h| h.name == header.name) {
            Some(existing) => *existing = header,
            None => self.headers.push(header),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Header> {
        self.headers.iter().find(|h| h.name == name)
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Copies the headers for attaching to an outgoing call.
    pub fn to_vec(&self) -> Vec<Header> {
        self.headers.clone()
    }
}
