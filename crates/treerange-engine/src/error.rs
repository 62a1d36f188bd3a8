use thiserror::Error;

/// Failure modes of range and text operations.
///
/// Every fallible operation checks its preconditions and raises before any
/// tree edit happens, so a returned error never leaves the tree or the range
/// half-mutated. Unsuccessful *searches* are not errors: they come back as
/// `Ok(false)` or `Ok(None)`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    /// The range has been detached and accepts no further operations.
    #[error("range is detached")]
    InvalidState,

    /// An offset lies outside the container's current length.
    #[error("offset {offset} is out of bounds for node of length {length}")]
    IndexSize { offset: usize, length: usize },

    /// A boundary container is orphaned, or tree mutation shrank the
    /// container below a stored offset.
    #[error("range boundary is stale: {reason}")]
    StaleRange { reason: String },

    /// The requested structure is not expressible, such as inserting a node
    /// into one of its own descendants or cloning a doctype.
    #[error("hierarchy request error: {reason}")]
    HierarchyRequest { reason: String },

    /// The two positions live under different roots.
    #[error("nodes belong to different documents")]
    WrongDocument,

    /// The node kind is not usable where it was supplied.
    #[error("invalid node type: {reason}")]
    InvalidNodeType { reason: String },

    /// Range boundaries do not satisfy the operation's shape requirement.
    #[error("bad boundary points: {reason}")]
    BadBoundaryPoints { reason: String },

    /// The operation would modify a read-only node.
    #[error("no modification allowed: node is read-only")]
    NoModificationAllowed,

    /// A node lacked a parent where one was required.
    #[error("node not found in expected location: {reason}")]
    NotFound { reason: String },
}

impl RangeError {
    pub(crate) fn stale(reason: impl Into<String>) -> Self {
        RangeError::StaleRange {
            reason: reason.into(),
        }
    }

    pub(crate) fn hierarchy(reason: impl Into<String>) -> Self {
        RangeError::HierarchyRequest {
            reason: reason.into(),
        }
    }

    pub(crate) fn node_type(reason: impl Into<String>) -> Self {
        RangeError::InvalidNodeType {
            reason: reason.into(),
        }
    }

    pub(crate) fn boundary(reason: impl Into<String>) -> Self {
        RangeError::BadBoundaryPoints {
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(reason: impl Into<String>) -> Self {
        RangeError::NotFound {
            reason: reason.into(),
        }
    }
}
