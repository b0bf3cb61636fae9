mod find_sub_test;
mod set_data_test;
mod update_test;
