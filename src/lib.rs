pub mod analysis;
pub mod bank_identifier;
pub mod deep_clean;
pub mod delimited_ingest;
pub mod error;
pub mod fixed_width_ingest;
pub mod header_resolver;
pub mod ingest;
pub mod mapping_store;
pub mod matrix;
pub mod page_text_ingest;
pub mod preliminary_clean;
pub mod schema;
pub mod txt_ingest;

pub use analysis::{
    analyze_cash, analyze_cash_with, analyze_transfers, analyze_transfers_with, AnalysisConfig,
    AnalysisResult, CashSummary, CounterpartyStat, TransferSummary,
};
pub use bank_identifier::{identify_bank, Identification, IdentifyConfig};
pub use deep_clean::deep_clean;
pub use error::{CleanseError, Result};
pub use header_resolver::{resolve_header, HeaderScoreWeights};
pub use ingest::{ingest, SourceKind};
pub use mapping_store::{InMemoryMappingStore, JsonFileMappingStore, MappingStore};
pub use matrix::RawMatrix;
pub use preliminary_clean::{merge_cleaned, preliminary_clean, preliminary_clean_with_store};
pub use schema::{
    AccountField, AccountRecord, DetailField, DetailRecord, FieldMapping, FieldSchema, Record,
    RecordKind,
};
