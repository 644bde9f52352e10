pub mod decision;
pub mod evaluation;
pub mod policy;
pub mod transaction;

pub use decision::Decision;
pub use evaluation::{Evaluation, TraceEntry};
pub use policy::PolicyDocument;
pub use transaction::{FieldPath, Transaction};
