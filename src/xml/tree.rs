//! Owned XML element trees for navigating one bounded subtree.
//!
//! The pull parser hands each handler exactly one element's subtree; handlers
//! that need structured access decode it into an [`XmlElement`] tree. Only one
//! such tree is alive at a time, so memory stays bounded by the largest single
//! record, never the document.

/// One decoded XML element with its attributes, element children, and
/// directly-contained text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    /// Tag name without namespace prefix.
    pub name: String,

    /// Attributes in document order.
    pub attributes: Vec<(String, String)>,

    /// Element children in document order.
    pub children: Vec<XmlElement>,

    /// Concatenated text content directly inside this element (not from
    /// descendants), unescaped and untrimmed.
    pub text: String,
}

impl XmlElement {
    /// Create an empty element with the given tag name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Get an attribute value.
    ///
    /// # Arguments
    /// * `name` - Attribute name
    ///
    /// # Returns
    /// Attribute value, or `None` if not present
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Find the first child element with the given tag name.
    ///
    /// # Arguments
    /// * `tag` - Tag name to search for
    ///
    /// # Returns
    /// First matching child element, or `None` if not found
    #[must_use]
    pub fn find_child(&self, tag: &str) -> Option<&XmlElement> {
        self.children.iter().find(|child| child.name == tag)
    }

    /// Find all child elements with the given tag name.
    pub fn find_children<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |child| child.name == tag)
    }

    /// Find a descendant element matching a slash-separated path of tag names.
    ///
    /// # Arguments
    /// * `path` - Slash-separated path (e.g. "Trace/Primary")
    ///
    /// # Returns
    /// Matching element, or `None` if the path is not found
    ///
    /// # Examples
    /// ```
    /// use fpr_to_sonarqube::xml::XmlElement;
    ///
    /// let mut primary = XmlElement::new("Primary");
    /// primary.children.push(XmlElement::new("Entry"));
    /// let mut trace = XmlElement::new("Trace");
    /// trace.children.push(primary);
    ///
    /// assert!(trace.find_by_path("Primary/Entry").is_some());
    /// assert!(trace.find_by_path("Primary/Missing").is_none());
    /// ```
    #[must_use]
    pub fn find_by_path(&self, path: &str) -> Option<&XmlElement> {
        let mut current = self;
        for part in path.split('/') {
            current = current.find_child(part)?;
        }
        Some(current)
    }

    /// Get the trimmed text content directly inside this element.
    #[must_use]
    pub fn trimmed_text(&self) -> &str {
        self.text.trim()
    }
}
