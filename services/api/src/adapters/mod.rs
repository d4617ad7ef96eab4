pub mod db;
pub mod title_llm;

pub use db::DbAdapter;
pub use title_llm::OpenAiTitleAdapter;
