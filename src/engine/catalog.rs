// src/engine/catalog.rs

use serde::{Deserialize, Serialize};

use crate::models::category::Category;

/// One draw from the question bank inside a mixed section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubPool {
    pub category: Category,
    pub count: u32,
}

/// One subject block of the exam paper. Sections are taken strictly in
/// catalog order; the index of a section in the catalog is its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub category: Category,
    pub question_count: u32,
    pub time_limit_secs: u32,
    pub sub_pools: Vec<SubPool>,
}

impl Section {
    /// The fetch plan for this section, one (category, count) draw per
    /// pool in declaration order. A section without sub-pools is a single
    /// draw from its own category.
    pub fn pools(&self) -> Vec<SubPool> {
        if self.sub_pools.is_empty() {
            vec![SubPool {
                category: self.category,
                count: self.question_count,
            }]
        } else {
            self.sub_pools.clone()
        }
    }
}

/// The standard mock-exam paper: four ordered sections, with the coding
/// section drawing from two dedicated pools.
pub fn default_catalog() -> Vec<Section> {
    vec![
        Section {
            name: "Fundamentals".to_string(),
            category: Category::Fundamentals,
            question_count: 20,
            time_limit_secs: 1500,
            sub_pools: vec![],
        },
        Section {
            name: "Networking".to_string(),
            category: Category::Networking,
            question_count: 15,
            time_limit_secs: 1200,
            sub_pools: vec![],
        },
        Section {
            name: "Databases".to_string(),
            category: Category::Databases,
            question_count: 15,
            time_limit_secs: 1200,
            sub_pools: vec![],
        },
        Section {
            name: "Coding".to_string(),
            category: Category::Coding,
            question_count: 20,
            time_limit_secs: 1800,
            sub_pools: vec![
                SubPool {
                    category: Category::Algorithms,
                    count: 10,
                },
                SubPool {
                    category: Category::DataStructures,
                    count: 10,
                },
            ],
        },
    ]
}
