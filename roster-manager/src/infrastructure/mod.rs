pub mod document_store;
pub mod local_store;
pub mod naming;
pub mod remote_store;
pub mod repository;
pub mod sqlite_remote;
