//! Named field validators.
//!
//! Validators are pure: they inspect the serialized input and return the first
//! failing rule's message. Reporting the message is the dispatcher's job.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::types::FormInput;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Validation {
    Ok,
    Rejected(String),
}

impl Validation {
    fn reject(message: &str) -> Self {
        Validation::Rejected(message.to_string())
    }
}

pub type Validator = Arc<dyn Fn(&FormInput) -> Validation>;

#[derive(Clone)]
pub struct ValidatorRegistry {
    validators: HashMap<String, Validator>,
}

impl ValidatorRegistry {
    pub fn empty() -> Self {
        ValidatorRegistry {
            validators: HashMap::new(),
        }
    }

    pub fn insert(&mut self, name: &str, validator: Validator) {
        self.validators.insert(name.to_string(), validator);
    }

    pub fn get(&self, name: &str) -> Option<Validator> {
        self.validators.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.validators.contains_key(name)
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        let mut registry = ValidatorRegistry::empty();
        registry.insert("signup", Arc::new(signup));
        registry.insert("login", Arc::new(login));
        registry.insert("createPost", Arc::new(create_post));
        registry.insert("signupDetailed", Arc::new(signup_detailed));
        registry.insert("search", Arc::new(search));
        registry
    }
}

fn all_filled(input: &FormInput, names: &[&str]) -> bool {
    names.iter().all(|name| !input.text(name).is_empty())
}

fn all_filled_trimmed(input: &FormInput, names: &[&str]) -> bool {
    names.iter().all(|name| !input.text(name).trim().is_empty())
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
    })
}

pub fn signup(input: &FormInput) -> Validation {
    if !all_filled(input, &["username", "email", "password"]) {
        return Validation::reject("All fields are required for signup.");
    }
    Validation::Ok
}

pub fn login(input: &FormInput) -> Validation {
    if !all_filled(input, &["email", "password"]) {
        return Validation::reject("Please provide both email and password for login.");
    }
    Validation::Ok
}

pub fn create_post(input: &FormInput) -> Validation {
    if !all_filled_trimmed(input, &["title", "body"]) {
        return Validation::reject("Please fill out both the title and body fields.");
    }
    Validation::Ok
}

pub fn signup_detailed(input: &FormInput) -> Validation {
    if !all_filled(input, &["username", "email", "password", "confirmPassword"]) {
        return Validation::reject("All fields are required.");
    }
    if !email_pattern().is_match(input.text("email")) {
        return Validation::reject("Please enter a valid email address.");
    }
    let password = input.text("password");
    // Measured in UTF-16 code units, as the browser reports a field's length.
    if password.encode_utf16().count() < 8 {
        return Validation::reject("Password must be at least 8 characters long.");
    }
    if password != input.text("confirmPassword") {
        return Validation::reject("Passwords do not match.");
    }
    if !input.checked("terms") {
        return Validation::reject("You must agree to the terms and conditions.");
    }
    Validation::Ok
}

pub fn search(input: &FormInput) -> Validation {
    if input.text("query").trim().is_empty() {
        return Validation::reject("Please enter a topic or title to search.");
    }
    Validation::Ok
}
