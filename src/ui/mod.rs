pub mod browse;
pub mod chat_view;
pub mod dashboard;
pub mod listings;
pub mod login;
pub mod main_window;
pub mod optimistic;
pub mod search;
pub mod sidebar;
