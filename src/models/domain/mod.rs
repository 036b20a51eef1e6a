pub mod file_data;
pub mod history_item;
pub mod quiz;
pub mod quiz_question;
pub mod session;
pub mod user;
pub use file_data::FileData;
pub use history_item::{HistoryItem, Language};
pub use quiz::{QuizSet, TimerConfig, TimerMode};
pub use quiz_question::QuizQuestion;
pub use session::{GuestUsage, SessionSnapshot, ViewState};
pub use user::Identity;
