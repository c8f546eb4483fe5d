mod chain;
mod multiplex;
mod server;

fn main() {}
