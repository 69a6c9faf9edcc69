//! Customer records and loan arithmetic

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A borrower on file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: String,
    pub full_name: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    pub ssn_last_four: String,
    pub loan_number: String,
    pub current_balance: f64,
    pub next_emi_amount: f64,
    pub next_due_date: NaiveDate,
    pub late_fee: f64,
    pub interest_rate: f64,
}

impl Customer {
    /// Overdue position as of `today`
    ///
    /// The due date itself already counts, with zero days overdue.
    pub fn overdue_status(&self, today: NaiveDate) -> OverdueStatus {
        if self.next_due_date <= today {
            OverdueStatus {
                is_overdue: true,
                days_overdue: (today - self.next_due_date).num_days(),
                overdue_amount: self.next_emi_amount,
            }
        } else {
            OverdueStatus::default()
        }
    }

    /// EMI summary handed to the model
    pub fn emi_details(&self) -> EmiDetails {
        EmiDetails::from(self)
    }

    /// Exact match against the SSN last four digits
    pub fn matches_ssn(&self, verification_data: &str) -> bool {
        verification_data == self.ssn_last_four
    }
}

/// Upcoming EMI information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmiDetails {
    pub next_emi_amount: f64,
    pub next_due_date: NaiveDate,
    pub current_balance: f64,
    pub loan_number: String,
    pub late_fee: f64,
    pub interest_rate: f64,
}

impl From<&Customer> for EmiDetails {
    fn from(customer: &Customer) -> Self {
        Self {
            next_emi_amount: customer.next_emi_amount,
            next_due_date: customer.next_due_date,
            current_balance: customer.current_balance,
            loan_number: customer.loan_number.clone(),
            late_fee: customer.late_fee,
            interest_rate: customer.interest_rate,
        }
    }
}

/// Overdue position of a loan
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OverdueStatus {
    pub is_overdue: bool,
    pub days_overdue: i64,
    pub overdue_amount: f64,
}

/// Lookup of customers by phone number
pub trait CustomerDirectory: Send + Sync {
    /// Find a customer by phone number
    fn get(&self, phone: &str) -> Option<Customer>;

    /// Whether a phone number is on file
    fn contains(&self, phone: &str) -> bool {
        self.get(phone).is_some()
    }

    /// All known phone numbers, sorted
    fn phones(&self) -> Vec<String>;
}

/// Directory backed by a map keyed on phone number
#[derive(Debug, Clone, Default)]
pub struct InMemoryCustomerDirectory {
    customers: HashMap<String, Customer>,
}

impl InMemoryCustomerDirectory {
    pub fn new(customers: impl IntoIterator<Item = Customer>) -> Self {
        Self {
            customers: customers
                .into_iter()
                .map(|c| (c.phone.clone(), c))
                .collect(),
        }
    }

    /// Directory holding the built-in sample customers
    pub fn with_samples() -> Self {
        Self::new(sample_customers())
    }

    pub fn len(&self) -> usize {
        self.customers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }
}

impl CustomerDirectory for InMemoryCustomerDirectory {
    fn get(&self, phone: &str) -> Option<Customer> {
        self.customers.get(phone).cloned()
    }

    fn contains(&self, phone: &str) -> bool {
        self.customers.contains_key(phone)
    }

    fn phones(&self) -> Vec<String> {
        let mut phones: Vec<String> = self.customers.keys().cloned().collect();
        phones.sort();
        phones
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

/// Built-in sample customers
pub fn sample_customers() -> Vec<Customer> {
    vec![
        Customer {
            customer_id: "CUST001".to_string(),
            full_name: "Swastik Kumar Sahu".to_string(),
            phone: "+917008817812".to_string(),
            date_of_birth: date(1985, 6, 15),
            ssn_last_four: "1234".to_string(),
            loan_number: "LN001234".to_string(),
            current_balance: 15000.0,
            next_emi_amount: 750.0,
            next_due_date: date(2025, 6, 28),
            late_fee: 50.0,
            interest_rate: 12.5,
        },
        Customer {
            customer_id: "CUST002".to_string(),
            full_name: "Sarah Johnson".to_string(),
            phone: "+1234567891".to_string(),
            date_of_birth: date(1990, 3, 22),
            ssn_last_four: "5678".to_string(),
            loan_number: "LN005678".to_string(),
            current_balance: 8500.0,
            next_emi_amount: 425.0,
            next_due_date: date(2025, 7, 20),
            late_fee: 35.0,
            interest_rate: 11.0,
        },
        Customer {
            customer_id: "CUST003".to_string(),
            full_name: "Mike Davis".to_string(),
            phone: "+1234567892".to_string(),
            date_of_birth: date(1988, 11, 10),
            ssn_last_four: "9012".to_string(),
            loan_number: "LN009012".to_string(),
            current_balance: 22000.0,
            next_emi_amount: 1100.0,
            next_due_date: date(2025, 6, 18),
            late_fee: 75.0,
            interest_rate: 13.0,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sarah() -> Customer {
        InMemoryCustomerDirectory::with_samples()
            .get("+1234567891")
            .unwrap()
    }

    #[test]
    fn test_overdue_after_due_date() {
        let status = sarah().overdue_status(date(2025, 7, 25));
        assert!(status.is_overdue);
        assert_eq!(status.days_overdue, 5);
        assert_eq!(status.overdue_amount, 425.0);
    }

    #[test]
    fn test_overdue_on_due_date() {
        let status = sarah().overdue_status(date(2025, 7, 20));
        assert!(status.is_overdue);
        assert_eq!(status.days_overdue, 0);
        assert_eq!(status.overdue_amount, 425.0);
    }

    #[test]
    fn test_not_overdue_before_due_date() {
        let status = sarah().overdue_status(date(2025, 7, 19));
        assert_eq!(status, OverdueStatus::default());

        let status = sarah().overdue_status(date(2025, 7, 1));
        assert!(!status.is_overdue);
        assert_eq!(status.days_overdue, 0);
        assert_eq!(status.overdue_amount, 0.0);
    }

    #[test]
    fn test_emi_details() {
        let details = sarah().emi_details();
        assert_eq!(details.loan_number, "LN005678");
        assert_eq!(details.next_emi_amount, 425.0);

        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["next_due_date"], "2025-07-20");
    }

    #[test]
    fn test_directory_lookup() {
        let dir = InMemoryCustomerDirectory::with_samples();
        assert_eq!(dir.len(), 3);
        assert!(dir.contains("+917008817812"));
        assert!(!dir.contains("+10000000000"));
        assert!(dir.get("+10000000000").is_none());
        assert_eq!(
            dir.phones(),
            vec!["+1234567891", "+1234567892", "+917008817812"]
        );
    }

    #[test]
    fn test_ssn_match_is_exact() {
        let customer = sarah();
        assert!(customer.matches_ssn("5678"));
        assert!(!customer.matches_ssn(" 5678"));
        assert!(!customer.matches_ssn("567"));
    }
}
