mod codes;
mod common;
