use crate::processor::column::ColumnType;

pub const ORDER_DATE: &str = "Order_Date";
pub const SHIP_DATE: &str = "Ship_Date";
pub const SHIP_MODE: &str = "Ship_Mode";
pub const SALES: &str = "Sales";
pub const QUANTITY: &str = "Quantity";
pub const PROFIT: &str = "Profit";
pub const REGION: &str = "Region";
pub const SUB_CATEGORY: &str = "Sub_Category";
pub const PRODUCT_REFERENCE: &str = "Product_Reference";
pub const STATE: &str = "State";

pub const ORDER_MONTH: &str = "Order_Month";
pub const SHIPPING_DURATION: &str = "Shipping_Duration";
pub const SALES_PER_QUANTITY: &str = "Sales_Per_Quantity";
pub const PROFIT_MARGIN: &str = "Profit_Margin";
pub const YEAR_FROM_ORDER_DATE: &str = "Year_from_Order_Date";
pub const ORDER_PRIORITY: &str = "Order_Priority";
pub const ORDER_VALUE: &str = "Order_Value";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub col_type: ColumnType,
}

/// Column name to type mapping supplied at load time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: &str, col_type: ColumnType) -> Self {
        self.fields.push(Field {
            name: name.to_string(),
            col_type,
        });
        self
    }

    /// The base columns of a sales record
    pub fn sales_store() -> Self {
        Schema::new()
            .with_field(ORDER_DATE, ColumnType::Date)
            .with_field(SHIP_DATE, ColumnType::Date)
            .with_field(SHIP_MODE, ColumnType::Str)
            .with_field(SALES, ColumnType::Float64)
            .with_field(QUANTITY, ColumnType::Int64)
            .with_field(PROFIT, ColumnType::Float64)
            .with_field(REGION, ColumnType::Str)
            .with_field(SUB_CATEGORY, ColumnType::Str)
            .with_field(PRODUCT_REFERENCE, ColumnType::Str)
            .with_field(STATE, ColumnType::Str)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn type_of(&self, name: &str) -> Option<ColumnType> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.col_type)
    }
}
