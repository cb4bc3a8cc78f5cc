pub mod m202508010001_create_users;
pub mod m202508010002_create_activation_codes;
