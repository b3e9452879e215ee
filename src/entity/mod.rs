pub mod categories;
pub mod customers;
pub mod orders;
pub mod products;
pub mod users;

pub use categories::Entity as Categories;
pub use customers::Entity as Customers;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use users::Entity as Users;
