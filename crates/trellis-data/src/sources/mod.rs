pub mod csv_source;
pub mod demo_source;

pub use csv_source::CsvSource;
pub use demo_source::SalesDemoSource;
