pub mod db;

pub use db::{
    create_category_list, create_db, delete_category_list, get_all_category_lists,
    get_category_list, get_category_list_by_name, get_default_category_list,
    search_category_lists, seed_default_category_list, set_default_category_list,
    update_category_list, CategoryList, DbPool, StorageError, DEFAULT_LIST_NAME,
};
