// src/models/mod.rs

pub mod answer;
pub mod category;
pub mod exam;
pub mod question;
pub mod score;
