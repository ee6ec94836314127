mod admin;
mod degraded;
mod page_load;
mod scanned_pages;
