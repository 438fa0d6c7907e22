pub mod binance;
pub mod evaluate;
pub mod scanner;
pub mod symbols;

pub use binance::BinanceClient;
pub use evaluate::{evaluate_symbol, EvaluationParams};
pub use scanner::{PassReport, Scanner, ScannerHandle};
pub use symbols::{normalize, resolve};
