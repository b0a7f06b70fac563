pub mod db;

pub use db::{
    create_db, get_all_receipts, get_receipt_by_id, insert_receipt, update_receipt_split,
    DbPool, ReceiptRecord,
};
