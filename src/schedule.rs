pub mod scheduler;

#[cfg(test)]
mod tests {
    mod allocation;
    mod proptests;
    mod scenario;
    mod utils;
    mod violations;
}
