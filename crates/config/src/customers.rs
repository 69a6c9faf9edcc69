//! Customer seed configuration

use loan_advisor_core::{sample_customers, Customer, InMemoryCustomerDirectory};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ConfigError;

/// Where the in-memory customer directory is seeded from
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CustomersConfig {
    /// YAML file holding a list of customers; built-in samples when unset
    #[serde(default)]
    pub seed_path: Option<String>,
}

impl CustomersConfig {
    /// Load the customer list
    pub fn load_customers(&self) -> Result<Vec<Customer>, ConfigError> {
        match &self.seed_path {
            Some(path) => load_seed_file(Path::new(path)),
            None => Ok(sample_customers()),
        }
    }

    /// Build the directory from the configured seed
    pub fn directory(&self) -> Result<InMemoryCustomerDirectory, ConfigError> {
        let customers = self.load_customers()?;
        tracing::info!(count = customers.len(), "Customer directory seeded");
        Ok(InMemoryCustomerDirectory::new(customers))
    }
}

fn load_seed_file(path: &Path) -> Result<Vec<Customer>, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;
    let customers: Vec<Customer> = serde_yaml::from_str(&raw)?;

    if let Some(dup) = first_duplicate_phone(&customers) {
        return Err(ConfigError::InvalidValue {
            field: "customers.seed_path".to_string(),
            message: format!("duplicate phone number {}", dup),
        });
    }

    Ok(customers)
}

fn first_duplicate_phone(customers: &[Customer]) -> Option<&str> {
    let mut seen = std::collections::HashSet::new();
    customers
        .iter()
        .map(|c| c.phone.as_str())
        .find(|phone| !seen.insert(*phone))
}
