mod crawl_tests;
mod engine_tests;
