mod progress;
mod reports;
