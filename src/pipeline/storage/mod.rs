// Pipeline storage: where migrated documents are written

pub mod in_memory;
pub mod mongo;
pub mod traits;

pub use in_memory::InMemoryStore;
pub use mongo::MongoStore;
pub use traits::PatientStore;
