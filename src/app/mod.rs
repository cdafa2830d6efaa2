// Application layer - Use case interactors

pub mod clip_interactor;
pub mod concat_interactor;
pub mod container;
pub mod fetch_interactor;
pub mod request_interactor;

// Re-export interactors
pub use clip_interactor::ClipInteractor;
pub use concat_interactor::ConcatInteractor;
pub use container::{AppContainer, DefaultAppContainer};
pub use fetch_interactor::{FetchInteractor, FetchSettings};
pub use request_interactor::{ClipDraft, ConcatDraft, RequestInteractor};
