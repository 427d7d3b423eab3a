//! Basic usage example for `Poly`.
//!
//! Shapes are kept in a list of containers that only know them as `dyn Shape`. The list can be
//! copied deeply, and individual shapes can be recovered as their exact type.

use poly::{ConstPoly, Dynamic, Poly, Unique, make, upcast};

trait Shape: Dynamic {
    fn area(&self) -> f64;

    fn scale(&mut self, factor: f64);
}

#[derive(Clone, Debug)]
struct Circle {
    radius: f64,
}

#[derive(Clone, Debug)]
struct Rectangle {
    width: f64,
    height: f64,
}

impl Shape for Circle {
    fn area(&self) -> f64 {
        std::f64::consts::PI * self.radius * self.radius
    }

    fn scale(&mut self, factor: f64) {
        self.radius *= factor;
    }
}

impl Shape for Rectangle {
    fn area(&self) -> f64 {
        self.width * self.height
    }

    fn scale(&mut self, factor: f64) {
        self.width *= factor;
        self.height *= factor;
    }
}

upcast!(Circle => dyn Shape);
upcast!(Rectangle => dyn Shape);

fn main() {
    let mut shapes: Vec<Poly<dyn Shape>> = vec![
        make(Circle { radius: 1.0 }),
        make(Rectangle {
            width: 2.0,
            height: 3.0,
        }),
    ];

    // Copies are deep: scaling the originals leaves the snapshot untouched.
    let snapshot = shapes.clone();

    for shape in &mut shapes {
        shape.scale(2.0);
    }

    for (now, before) in shapes.iter().zip(&snapshot) {
        let name = now.exact_type().map(|exact| exact.name()).unwrap_or("nothing");
        println!("{name}: {:.2} -> {:.2}", before.area(), now.area());
    }

    // Recover the exact type when it is needed.
    if let Some(circle) = shapes.first().and_then(|shape| shape.downcast_ref::<Circle>()) {
        println!("The circle now has radius {}", circle.radius);
    }

    // Freeze a shape: only shared access from here on, and no more copies.
    let frozen: ConstPoly<dyn Shape, Unique> = shapes.remove(1).convert();
    println!(
        "Frozen rectangle: {:?}",
        frozen.downcast_ref::<Rectangle>()
    );
}
