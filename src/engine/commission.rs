const PRICE_RATE: f64 = 0.05;
const DISTANCE_RATE: f64 = 0.5;

/// Commission earned for carrying an order of `order_price` over `distance`.
pub fn commission(order_price: f64, distance: f64) -> f64 {
    (order_price * PRICE_RATE) + (distance * DISTANCE_RATE)
}
