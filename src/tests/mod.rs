// Behavioral tests for the monitors and the prebuild coordinator





#[cfg(test)]
mod test_detection;

#[cfg(test)]
mod test_scenarios;
