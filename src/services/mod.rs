pub mod aggregator;
pub mod batch_builder;
pub mod bitrix_client;
pub mod cache;
pub mod chat_collector;
pub mod git_collector;
pub mod markdown;
pub mod meeting_collector;
pub mod summarizer;
pub mod task_collector;
