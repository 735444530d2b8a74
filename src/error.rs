use thiserror::Error;

/// Errors raised by the graph model, the layout engine and the view model.
///
/// All of them are local and recoverable: a failed operation leaves the
/// graph as it was before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("pad {pad} cannot be linked to itself")]
    SelfLink { pad: String },

    #[error("pads {from} and {to} are already linked")]
    AlreadyLinked { from: String, to: String },

    #[error("node {node} cannot be linked by the user")]
    NotLinkable { node: String },

    #[error("pad {pad} is not attached to a live node")]
    DetachedPad { pad: String },

    #[error("edge {edge} has been disconnected from its pads")]
    DanglingEdge { edge: String },

    #[error("node {node} is not part of the layout")]
    UnknownNode { node: String },

    #[error("identifier {id} is beyond the allocator's range")]
    IdOutOfRange { id: String },
}

pub type Result<T> = std::result::Result<T, Error>;
