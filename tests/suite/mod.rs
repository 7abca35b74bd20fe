mod concurrency;
mod source;
