/// Redis key construction for the document store.
#[derive(Debug, Clone)]
pub struct KeyContext<'a> {
    pub prefix: &'a str,
}

impl<'a> KeyContext<'a> {
    pub fn new(prefix: &'a str) -> Self {
        Self { prefix }
    }

    /// Key of one document. Format: prefix:collection:id
    pub fn document(&self, collection: &str, id: &str) -> String {
        format!("{}:{}:{}", self.prefix, collection, id)
    }

    /// SCAN pattern matching every document of a collection (and nothing in its sub-collections).
    pub fn collection_pattern(&self, collection: &str) -> String {
        format!("{}:{}:*", self.prefix, collection)
    }

    /// Strips the key down to the document id, if it belongs to `collection`.
    pub fn document_id<'k>(&self, collection: &str, key: &'k str) -> Option<&'k str> {
        let head = format!("{}:{}:", self.prefix, collection);
        key.strip_prefix(head.as_str()).filter(|id| !id.contains(':'))
    }
}
