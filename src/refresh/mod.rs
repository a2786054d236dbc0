mod coordinator;

pub use coordinator::RefreshCoordinator;
