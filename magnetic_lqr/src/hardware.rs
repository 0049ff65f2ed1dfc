use nalgebra::Vector3;

/// Attitude and field measurements in the body (control) frame.
pub trait AttitudeSensors {
    /// Roll, pitch, yaw (rad).
    fn angular_position(&self) -> Vector3<f64>;
    /// Body rates (rad/s).
    fn angular_velocity(&self) -> Vector3<f64>;
    /// Ambient magnetic field (T).
    fn magnetic_field(&self) -> Vector3<f64>;
}

/// Three-axis magnetorquer set. Commands are fire-and-forget.
pub trait MagneticTorquers {
    /// Sets the commanded dipole moment (A m^2).
    fn command_dipole(&mut self, dipole: &Vector3<f64>);
}
