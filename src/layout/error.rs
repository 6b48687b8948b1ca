/// Fatal layout failures. Routing problems never end up here; they fall back
/// to direct edges instead.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// A predecessor of `element` is missing from every grid, so the flow
    /// graph does not match the element membership the engine was given.
    #[error("cannot find a grid cell for element {element}")]
    CellNotFound { element: String },
    #[error("element {element} belongs to a lane that is not part of its process")]
    UnknownParent { element: String },
}

pub type Result<T> = std::result::Result<T, LayoutError>;
