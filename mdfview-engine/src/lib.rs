pub mod command;
pub mod projector;
pub mod session;
pub mod view;

pub mod errors {
    use mdfview_io::IoError;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("no drawing is loaded")]
        NoDrawingLoaded,
        #[error(transparent)]
        Io(#[from] IoError),
    }
}
