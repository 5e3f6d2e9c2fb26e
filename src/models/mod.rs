mod entry;
mod id;
mod records;
mod snapshot;

pub use entry::{EntryKind, LedgerEntry};
pub use id::{Id, IdError};
pub use records::{
    parse_lenient_amount, parse_timestamp, ExpenseRecord, ExpenseStatus, PaymentRecord,
    PaymentType, RepairRecord, RepairStatus, SaleRecord, SaleStatus,
};
pub use snapshot::{Collection, SkippedRecords, SourceFailure, SourceSnapshot};
