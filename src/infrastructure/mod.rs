pub mod db;
pub mod openai;
pub mod storage;
