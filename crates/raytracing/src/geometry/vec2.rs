/// Screen-space or lens sample
#[derive(Clone, Copy, Default, Debug, PartialEq)]
pub struct Vec2(pub f32, pub f32);

impl Vec2 {
    pub fn x(&self) -> f32 {
        self.0
    }

    pub fn y(&self) -> f32 {
        self.1
    }
}
