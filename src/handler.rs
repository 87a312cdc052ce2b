//! Terminal handler records attached to route tree nodes.
//!
//! A node carries at most one handler of each [`HandlerKind`]. The slots are
//! independent: a directory may hold a layout and a page, only a layout, only an
//! error boundary, and so on.
//!
//! The `handler` reference is opaque to this crate. Collaborators decide what it
//! names (a function registered with a dispatcher, a module path, a file).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// The role a handler plays at its node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerKind {
    /// Renders the node's URL
    Page,
    /// API-style handler answering the node's URL
    #[serde(alias = "route")]
    Api,
    /// Error/fallback boundary for the node and everything below it
    Error,
    /// Wrapper around every page at or below the node
    Layout,
}

impl HandlerKind {
    pub const ALL: [HandlerKind; 4] = [
        HandlerKind::Page,
        HandlerKind::Api,
        HandlerKind::Error,
        HandlerKind::Layout,
    ];

    /// Whether a handler of this kind makes its node matchable
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, HandlerKind::Page | HandlerKind::Api)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HandlerKind::Page => "page",
            HandlerKind::Api => "api",
            HandlerKind::Error => "error",
            HandlerKind::Layout => "layout",
        }
    }
}

/// A kind name that is not `page`, `api`/`route`, `error` or `layout`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownHandlerKind(pub String);

impl fmt::Display for UnknownHandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown handler kind '{}'", self.0)
    }
}

impl std::error::Error for UnknownHandlerKind {}

impl FromStr for HandlerKind {
    type Err = UnknownHandlerKind;

    /// Case-insensitive; `route` is an alias for `api`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "page" => Ok(HandlerKind::Page),
            "api" | "route" => Ok(HandlerKind::Api),
            "error" => Ok(HandlerKind::Error),
            "layout" => Ok(HandlerKind::Layout),
            _ => Err(UnknownHandlerKind(s.to_string())),
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A handler reference of a given kind
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerRecord {
    pub kind: HandlerKind,
    /// Opaque handler reference interpreted by the caller
    pub handler: Arc<str>,
}

impl HandlerRecord {
    pub fn new(kind: HandlerKind, handler: impl Into<Arc<str>>) -> Self {
        Self {
            kind,
            handler: handler.into(),
        }
    }

    pub fn page(handler: impl Into<Arc<str>>) -> Self {
        Self::new(HandlerKind::Page, handler)
    }

    pub fn api(handler: impl Into<Arc<str>>) -> Self {
        Self::new(HandlerKind::Api, handler)
    }

    pub fn error(handler: impl Into<Arc<str>>) -> Self {
        Self::new(HandlerKind::Error, handler)
    }

    pub fn layout(handler: impl Into<Arc<str>>) -> Self {
        Self::new(HandlerKind::Layout, handler)
    }
}

impl fmt::Display for HandlerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.handler)
    }
}

/// One optional slot per [`HandlerKind`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerSlots {
    pub page: Option<HandlerRecord>,
    pub api: Option<HandlerRecord>,
    pub error: Option<HandlerRecord>,
    pub layout: Option<HandlerRecord>,
}

impl HandlerSlots {
    #[must_use]
    pub fn get(&self, kind: HandlerKind) -> Option<&HandlerRecord> {
        self.slot(kind).as_ref()
    }

    fn slot(&self, kind: HandlerKind) -> &Option<HandlerRecord> {
        match kind {
            HandlerKind::Page => &self.page,
            HandlerKind::Api => &self.api,
            HandlerKind::Error => &self.error,
            HandlerKind::Layout => &self.layout,
        }
    }

    fn slot_mut(&mut self, kind: HandlerKind) -> &mut Option<HandlerRecord> {
        match kind {
            HandlerKind::Page => &mut self.page,
            HandlerKind::Api => &mut self.api,
            HandlerKind::Error => &mut self.error,
            HandlerKind::Layout => &mut self.layout,
        }
    }

    /// Fill the record's slot.
    ///
    /// If the slot is already taken the existing record is left in place and
    /// the rejected record is handed back.
    pub fn attach(&mut self, record: HandlerRecord) -> Result<(), HandlerRecord> {
        let slot = self.slot_mut(record.kind);
        if slot.is_some() {
            return Err(record);
        }
        *slot = Some(record);
        Ok(())
    }

    /// Whether the node answers requests (has a page or API handler)
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.page.is_some() || self.api.is_some()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Present records in [`HandlerKind::ALL`] order
    pub fn iter(&self) -> impl Iterator<Item = &HandlerRecord> {
        HandlerKind::ALL.into_iter().filter_map(|k| self.get(k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_rejects_second_record_of_same_kind() {
        let mut slots = HandlerSlots::default();
        assert!(slots.attach(HandlerRecord::page("a")).is_ok());
        let rejected = slots.attach(HandlerRecord::page("b")).unwrap_err();
        assert_eq!(&*rejected.handler, "b");
        assert_eq!(slots.page.as_ref().map(|r| &*r.handler), Some("a"));
    }

    #[test]
    fn test_slots_are_independent() {
        let mut slots = HandlerSlots::default();
        slots.attach(HandlerRecord::layout("root")).unwrap();
        assert!(!slots.is_terminal());
        slots.attach(HandlerRecord::api("handler")).unwrap();
        assert!(slots.is_terminal());
        assert_eq!(slots.iter().count(), 2);
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("Page".parse::<HandlerKind>(), Ok(HandlerKind::Page));
        assert_eq!("route".parse::<HandlerKind>(), Ok(HandlerKind::Api));
        let err = "middleware".parse::<HandlerKind>().unwrap_err();
        assert_eq!(err.to_string(), "unknown handler kind 'middleware'");
    }
}
