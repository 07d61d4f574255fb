pub mod plist;
