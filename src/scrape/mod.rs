pub mod table_scraper;
