//! Usage statistics for conversational AI export archives, plus recurring
//! phrase discovery over prompt collections.

pub mod analysis;
pub mod archive;
pub mod config;
pub mod logging;
pub mod pricing;
pub mod prompts;
pub mod tokens;
pub mod types;
pub mod usage;
pub mod utils;

pub use analysis::{ConversationAnalysis, DashboardSummary};
pub use archive::{load_archive, load_archives, parse_archive};
pub use pricing::PricingTable;
pub use prompts::{AnalyzeOptions, AnalyzeResult, analyze, parse_prompts};
pub use types::ConversationRecord;
pub use usage::{MonthlyUsage, monthly_model_token_usage};
