pub mod sign_leakage;
