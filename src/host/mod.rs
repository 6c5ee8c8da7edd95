/// Host adapters - Gateway
mod console;

pub use console::ConsoleHost;
