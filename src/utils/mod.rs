pub mod db_utils;
pub mod salary_cache;
