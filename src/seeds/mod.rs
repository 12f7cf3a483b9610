pub mod pharmacies_seed;

pub use pharmacies_seed::seed_default_pharmacies;
