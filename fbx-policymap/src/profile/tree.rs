use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::Reader;

use super::ProfileError;

/// One element of a profile export. Attributes are not used by the format.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileNode {
    pub tag: String,
    /// Trimmed text content; empty when the element has none.
    pub text: String,
    pub children: Vec<ProfileNode>,
}

impl ProfileNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// First child with the given tag.
    pub fn child(&self, tag: &str) -> Option<&ProfileNode> {
        self.children.iter().find(|child| child.tag == tag)
    }

    /// All children with the given tag, in document order.
    pub fn children<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a ProfileNode> + 'a {
        self.children.iter().filter(move |child| child.tag == tag)
    }

    /// Trimmed text of the first child with the given tag, if present and non-empty.
    pub fn text_of(&self, tag: &str) -> Option<&str> {
        self.child(tag)
            .map(|child| child.text.as_str())
            .filter(|text| !text.is_empty())
    }

    /// Items of a `<list><item/>...</list>` wrapper. A missing wrapper is empty.
    pub fn list<'a>(
        &'a self,
        wrapper: &'a str,
        item: &'a str,
    ) -> impl Iterator<Item = &'a ProfileNode> + 'a {
        self.child(wrapper)
            .into_iter()
            .flat_map(move |list| list.children(item))
    }
}

/// Read XML bytes into a [`ProfileNode`] tree.
pub fn read_tree(xml: &[u8]) -> Result<ProfileNode, ProfileError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<ProfileNode> = Vec::new();
    let mut root: Option<ProfileNode> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => stack.push(ProfileNode::new(tag_name(e.name())?)),
            Event::Empty(e) => {
                let node = ProfileNode::new(tag_name(e.name())?);
                attach(&mut stack, &mut root, node)?;
            }
            Event::Text(e) => {
                if let Some(current) = stack.last_mut() {
                    let text = e.unescape()?;
                    current.text.push_str(text.trim());
                }
            }
            Event::CData(e) => {
                if let Some(current) = stack.last_mut() {
                    let text = std::str::from_utf8(e.as_ref())?;
                    current.text.push_str(text.trim());
                }
            }
            Event::End(_) => {
                let node = stack.pop().ok_or_else(|| {
                    ProfileError::Malformed("closing tag without open tag".to_string())
                })?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) | Event::Comment(_) => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(ProfileError::Malformed(
            "unclosed element(s) at end of document".to_string(),
        ));
    }
    root.ok_or_else(|| ProfileError::Malformed("no root element found".to_string()))
}

fn attach(
    stack: &mut [ProfileNode],
    root: &mut Option<ProfileNode>,
    node: ProfileNode,
) -> Result<(), ProfileError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        Ok(())
    } else if root.is_none() {
        *root = Some(node);
        Ok(())
    } else {
        Err(ProfileError::Malformed(
            "multiple top-level elements found".to_string(),
        ))
    }
}

fn tag_name(name: QName<'_>) -> Result<String, ProfileError> {
    Ok(std::str::from_utf8(name.as_ref())?.to_string())
}
